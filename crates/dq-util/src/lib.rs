//! Small standalone utilities the table and transport layers depend on:
//! UTF-8 sanitization, hex formatting, hostname/IP/port discovery, streaming
//! file hashing, and subscription-key sanitization.

pub mod filehash;
pub mod hex;
pub mod net;
pub mod subscription;
pub mod utf8;
