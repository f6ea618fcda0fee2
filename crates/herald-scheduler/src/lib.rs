//! # Herald Scheduler
//!
//! The recurring daily trigger that drains the scheduled-content queue
//! through the dispatcher, and the lightweight cron expression it fires on.
//!
//! The timer is deliberately separated from the drain-and-dispatch cycle:
//! [`DailyTrigger::run_cycle`] contains all the business logic and takes no
//! clock, so tests drive it directly while [`DailyTrigger::run`] only sleeps
//! until the next cron fire.

pub mod cron;
pub mod trigger;

pub use cron::CronSchedule;
pub use trigger::DailyTrigger;
