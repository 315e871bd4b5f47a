pub mod drug;
pub mod study;

pub use drug::{Drug, PKParameter, PKProfile};
pub use study::{
    Blinding, ClinicalStudy, DesignType, Endpoint, EndpointType, StudyDesign, StudyPopulation,
};
