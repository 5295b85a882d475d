pub mod mirror_dto;
pub mod reservation_dto;
pub mod topo_dto;
