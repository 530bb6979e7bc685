//! Wall-clock implementation of the `Clock` port.

use chrono::{Local, NaiveDateTime};

use crate::application::ports::Clock;

/// Local wall-clock time, matching how timestamp tags are written.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}
