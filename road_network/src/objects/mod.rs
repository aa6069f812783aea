pub mod elevation;
pub mod junction;
pub mod lane;
pub mod road;
pub mod spline;
