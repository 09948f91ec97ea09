//! Core of Ephemeral: tasks that expire unless completed.
//!
//! The [`controller::Controller`] owns the task list and the settings and
//! persists both through a [`storage::KeyValueStore`]. The status of a task
//! is always derived from its fields and the current instant
//! ([`models::Task::status`]); completed and expired tasks are grouped for
//! display with [`sections::group_by_section`].

pub mod commands;
pub mod controller;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod sections;
pub mod settings;
pub mod share;
pub mod storage;
pub mod tui;
