pub mod check;
pub mod contacts;
pub mod init;
pub mod run;
pub mod validate;
