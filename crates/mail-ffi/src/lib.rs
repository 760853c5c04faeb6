//! UniFFI bindings crate for the mail library
//!
//! Wraps the mail crate for UniFFI library mode so the Android app can load a
//! single `libmail_ffi.so` and generate Kotlin bindings from it.
//!
//! ## Building for Android
//!
//! 1. Build the shared library for each ABI (with the NDK linker configured):
//!    ```bash
//!    cargo build --release -p mail-ffi --target aarch64-linux-android
//!    cargo build --release -p mail-ffi --target x86_64-linux-android
//!    ```
//!
//! 2. Generate Kotlin bindings:
//!    ```bash
//!    cargo run -p mail-ffi --features bindgen --bin uniffi-bindgen generate \
//!        --library target/aarch64-linux-android/release/libmail_ffi.so \
//!        --language kotlin \
//!        --out-dir generated/kotlin
//!    ```
//!
//! 3. Copy the `.so` files into `app/src/main/jniLibs/<abi>/`.

pub use mail::ffi::*;

// Library mode needs the scaffolding symbols re-exported from this cdylib
mail::uniffi_reexport_scaffolding!();
