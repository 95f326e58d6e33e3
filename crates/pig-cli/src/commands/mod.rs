pub mod init;
pub mod update_check;
pub mod version;
