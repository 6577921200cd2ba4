// MotionPlayer — ESP-IDF Hardware Adapters

pub mod dfplayer;
pub mod gpio;
