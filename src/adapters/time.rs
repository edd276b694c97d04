//! Clock adapters.
//!
//! - [`Esp32Clock`]: `esp_timer_get_time()` and SNTP-set local time on
//!   `target_os = "espidf"`, `std::time::Instant` and chrono's UTC clock
//!   elsewhere.
//! - [`ManualClock`]: host-side clock that only moves when told to.  Used by
//!   tests and the simulation loop.

use core::cell::Cell;

use crate::app::ports::ClockPort;
use crate::clock::{Instant, Millis};
use crate::events::TimeData;

/// Anything before 2020-01-01 means the RTC has not been synced yet.
const EPOCH_2020: i64 = 1_577_836_800;

/// Monotonic millisecond clock for the ESP32-S3.
pub struct Esp32Clock {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for Esp32Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl Esp32Clock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Microseconds since boot.
    #[cfg(target_os = "espidf")]
    pub fn uptime_us(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64
    }

    /// Microseconds since boot.
    #[cfg(not(target_os = "espidf"))]
    pub fn uptime_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }

    /// Local wall-clock time.  `None` until SNTP has set the clock.
    #[cfg(target_os = "espidf")]
    pub fn wall_time(&self) -> Option<TimeData> {
        let mut tv = esp_idf_svc::sys::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        if unsafe { esp_idf_svc::sys::gettimeofday(&mut tv, core::ptr::null_mut()) } != 0 {
            return None;
        }
        if i64::from(tv.tv_sec) < EPOCH_2020 {
            return None;
        }
        let secs = tv.tv_sec as esp_idf_svc::sys::time_t;
        // SAFETY: tm is plain old data; localtime_r fills every field.
        let mut tm: esp_idf_svc::sys::tm = unsafe { core::mem::zeroed() };
        if unsafe { esp_idf_svc::sys::localtime_r(&secs, &mut tm) }.is_null() {
            return None;
        }
        Some(TimeData {
            year: (tm.tm_year + 1900) as u16,
            month: (tm.tm_mon + 1) as u8,
            day: tm.tm_mday as u8,
            hour: tm.tm_hour as u8,
            minute: tm.tm_min as u8,
            second: tm.tm_sec as u8,
            weekday: tm.tm_wday as u8,
        })
    }

    /// UTC wall-clock time from the host clock.
    #[cfg(not(target_os = "espidf"))]
    pub fn wall_time(&self) -> Option<TimeData> {
        time_data_from_utc(&chrono::Utc::now())
    }
}

/// Calendar fields of a UTC timestamp.  `None` for an unsynced clock.
#[cfg(not(target_os = "espidf"))]
pub fn time_data_from_utc(dt: &chrono::DateTime<chrono::Utc>) -> Option<TimeData> {
    use chrono::{Datelike, Timelike};

    if dt.timestamp() < EPOCH_2020 {
        return None;
    }
    Some(TimeData {
        year: u16::try_from(dt.year()).ok()?,
        month: dt.month() as u8,
        day: dt.day() as u8,
        hour: dt.hour() as u8,
        minute: dt.minute() as u8,
        second: dt.second() as u8,
        weekday: dt.weekday().num_days_from_sunday() as u8,
    })
}

impl ClockPort for Esp32Clock {
    fn now(&self) -> Instant {
        Instant::from_micros(self.uptime_us())
    }
}

/// A clock that stands still between explicit `set`/`advance` calls.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<u32>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, ms: u32) {
        self.now.set(ms);
    }

    pub fn advance(&self, ms: Millis) {
        self.now.set(self.now.get().wrapping_add(ms));
    }
}

impl ClockPort for ManualClock {
    fn now(&self) -> Instant {
        Instant::from_millis(self.now.get())
    }
}
