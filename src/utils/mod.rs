//! Small cross-cutting helpers.

pub mod ids;
