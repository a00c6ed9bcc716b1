//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements         | Connects to                 |
//! |------------|--------------------|-----------------------------|
//! | `log_sink` | EventSink          | Serial log output           |
//! | `nvs`      | PreferenceStore    | NVS / in-memory store       |
//! | `serial`   | PacketTransport    | UART byte stream            |
//! | `time`     | (clock only)       | ESP32 system timer          |

pub mod log_sink;
pub mod nvs;
pub mod serial;
pub mod time;
