pub mod date_suggester;
pub mod maps;
pub mod nearest_neighbor;
pub mod optimizer_client;
pub mod reasoning;
pub mod route_optimizer;
pub mod route_view;
pub mod stop_loader;
pub mod time_estimator;
