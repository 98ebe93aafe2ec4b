// Object model: values, game objects, methods and the markup builder

mod builder;
mod game_object;
mod method;
mod value;

pub use builder::{build_object, parse_parameters, ParameterError, METHOD_TAG};
pub use game_object::{FieldError, GameObject, RESERVED_FIELDS};
pub use method::Method;
pub use value::Value;
