//! # Equipment Interface
//!
//! This module defines the interface structures which are exchanged with equipment. All
//! structures are sent as JSON strings over the sockets described in [`crate::net`].

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod cam;
pub mod drive;
pub mod odom;
pub mod signs;
