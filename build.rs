fn main() {
    // ESP-IDF link/env propagation is only needed for the device build;
    // host test builds skip it entirely.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
