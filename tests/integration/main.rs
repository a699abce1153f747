//! End-to-end tests over the in-memory stores.

mod admission_test;
mod broadcast_test;
mod helpers;
mod presence_test;
