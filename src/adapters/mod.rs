//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements         | Connects to                     |
//! |-------------|--------------------|---------------------------------|
//! | `device_id` |:                  | eFuse MAC                       |
//! | `entropy`   | EntropyPort        | ESP32 RNG                       |
//! | `firebase`  | BackendPort        | Firebase RTDB + Firestore REST  |
//! | `hardware`  | DevicePort         | RFID, ranger, LCD, LEDs, buzzer |
//! | `log_sink`  | EventSink          | Serial log output               |
//! | `nvs`       | ConfigPort         | NVS / in-memory store           |
//! | `time`      | ClockPort          | ESP32 system timer              |
//! | `wifi`      | ConnectivityPort   | ESP-IDF WiFi STA                |

pub mod device_id;
pub mod entropy;
pub mod firebase;
pub mod hardware;
pub mod log_sink;
pub mod nvs;
pub mod time;
pub mod wifi;
