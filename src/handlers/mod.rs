// Route handlers
//
// auth     → login / logout / me           (/:collection/login, ...)
// data     → collection CRUD               (/:collection[/:id], /:collection/count)
// service  → service description, health, 404 fallback

pub mod auth;
pub mod data;
pub mod service;
pub mod utils;
