mod completion;
mod habit;
mod helpers;
mod summary;

pub(crate) use completion::{cmd_dec, cmd_inc, cmd_list, cmd_log, cmd_time, cmd_toggle};
pub(crate) use habit::{HabitOptions, cmd_add, cmd_archive, cmd_edit, cmd_remove, cmd_restore};
pub(crate) use helpers::Tracker;
pub(crate) use summary::{cmd_history, cmd_stats};
