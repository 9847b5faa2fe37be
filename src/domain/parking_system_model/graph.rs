pub mod graph_store;
pub mod route;
pub mod shortest_path;
