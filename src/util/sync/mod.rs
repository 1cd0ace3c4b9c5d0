pub mod init_cell;
pub mod priority;
pub mod volatile_cell;
