fn main() {
    // Build-time secrets are read with `option_env!`; rebuild when they change.
    for var in [
        "PARCELBOX_WIFI_SSID",
        "PARCELBOX_WIFI_PASSWORD",
        "PARCELBOX_FIREBASE_HOST",
        "PARCELBOX_FIREBASE_AUTH",
        "PARCELBOX_FIREBASE_API_KEY",
        "PARCELBOX_FIREBASE_PROJECT",
    ] {
        println!("cargo:rerun-if-env-changed={var}");
    }

    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
