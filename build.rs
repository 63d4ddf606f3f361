fn main() {
    // ESP-IDF environment is only needed for the firmware image; host
    // builds (tests, fuzzing) skip it.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
