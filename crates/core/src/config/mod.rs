//! Configuration: model parameters, their JSON persistence and named cell states.

mod parameters;
mod persistence;
mod presets;

pub use parameters::{
    FieldBounds, ModelParameters, ParameterError, StructureParameters, PARAMETER_KEYS,
};
pub use persistence::{load_parameters, read_parameter_record, save_parameters, LoadedParameters};
pub use presets::{CellState, CellStateLibrary};
