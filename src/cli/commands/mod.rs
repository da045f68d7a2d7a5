pub mod init;
pub mod update;
