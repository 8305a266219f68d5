// src/console/mod.rs
pub mod console;

mod environment_check;
mod generate_queue;
mod run;
mod run_dispatch;
mod set_daily_limit;
mod show_history;
mod show_stats;
