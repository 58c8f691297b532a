pub mod doctor;
pub mod export;
pub mod run;
pub mod stats;
