mod client;
mod digest;
mod energy_monitor;
mod solar_cloud;
mod source;
mod utility_meter;

pub use self::{
    energy_monitor::Api as EnergyMonitor,
    solar_cloud::Api as SolarCloud,
    source::Source,
    utility_meter::Api as UtilityMeter,
};
