#![allow(dead_code)]

pub mod entities;
pub mod schedule;
pub mod world;
