//! Test fixtures for common test scenarios.
//!
//! Platforms and a small catalog covering every dependency group.

use std::fs;
use std::path::{Path, PathBuf};

use crate::core::catalog::Catalog;
use crate::core::platform::PlatformFacts;

/// A catalog manifest with sources from every dependency group.
pub const SAMPLE_MANIFEST: &str = r#"
[package]
name = "grpcio"
version = "1.66.0"

[[module]]
name = "grpc._cython.cygrpc"
source = "src/python/grpcio/grpc/_cython/cygrpc.pyx"
helpers = ["src/python/grpcio/grpc/_cython/_cygrpc/fork_posix.cc"]
include_dirs = ["src/python/grpcio/grpc/_cython"]

[sources]
files = [
    "src/core/lib/surface/init.cc",
    "src/core/lib/iomgr/ev_poll_posix.cc",
    "third_party/abseil-cpp/absl/strings/str_cat.cc",
    "third_party/address_sorting/address_sorting.c",
    "third_party/boringssl-with-bazel/src/crypto/mem.c",
    "third_party/cares/cares/src/lib/ares_init.c",
    "third_party/re2/re2/re2.cc",
    "third_party/upb/upb/mem/arena.c",
    "third_party/utf8_range/utf8_range.c",
    "third_party/xxhash/xxhash.c",
    "third_party/zlib/inflate.c",
    { path = "src/boringssl/boringssl_prefix_symbols.c", group = "tls" },
]

[asm]
crypto_asm = [
    "third_party/boringssl-with-bazel/gen/crypto/aes-gcm-avx2-x86_64-linux.S",
    "third_party/boringssl-with-bazel/gen/crypto/chacha-armv8-linux.S",
]
"#;

pub fn linux() -> PlatformFacts {
    PlatformFacts::new("linux", "x86_64")
}

pub fn windows() -> PlatformFacts {
    PlatformFacts::new("windows", "x86_64")
}

pub fn darwin() -> PlatformFacts {
    PlatformFacts::new("macos", "aarch64").with_deployment_target("11.0")
}

pub fn sample_catalog() -> Catalog {
    Catalog::parse(SAMPLE_MANIFEST).expect("sample manifest parses")
}

/// Write the sample manifest into `root` and return its path.
pub fn write_sample_project(root: &Path) -> PathBuf {
    let path = root.join("extplan.toml");
    fs::write(&path, SAMPLE_MANIFEST).expect("write sample manifest");
    path
}
