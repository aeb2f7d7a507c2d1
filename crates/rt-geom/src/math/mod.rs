pub mod bounds;
pub mod distributions;
pub mod efloat;
pub mod float;
pub mod frame;
pub mod normal;
pub mod point;
pub mod transform;
pub mod vec;
