pub mod observation_dto;
pub mod system_dto;
