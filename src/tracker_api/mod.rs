// Local HTTP surface for the browser-side glue

mod models;
mod routes;
mod services;

pub use routes::TrackerApi;
