fn main() {
    // ESP-IDF link arguments only apply when cross-compiling for the chip;
    // host builds (unit tests) skip them.
    let target = std::env::var("TARGET").unwrap_or_default();
    if target.ends_with("espidf") {
        embuild::espidf::sysenv::output();
    }
}
