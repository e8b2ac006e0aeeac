mod init;
mod run;
mod setup;
mod slot;
mod status;

pub use init::cmd_init;
pub use run::cmd_run;
pub use setup::cmd_setup;
pub use slot::{cmd_slot_cleanup, cmd_slot_create, cmd_slot_drop};
pub use status::cmd_status;
