//! Optional command sets installed on top of [`Registry::standard`](crate::Registry::standard).

pub mod ods;
