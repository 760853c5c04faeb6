//! UniFFI bindgen binary for generating Kotlin bindings
//!
//! Usage:
//!   cargo run -p mail-ffi --features bindgen --bin uniffi-bindgen generate \
//!       --library target/aarch64-linux-android/release/libmail_ffi.so \
//!       --language kotlin \
//!       --out-dir generated/kotlin

fn main() {
    uniffi::uniffi_bindgen_main()
}
