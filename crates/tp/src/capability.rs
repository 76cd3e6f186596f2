//! The capability interface the planner consumes to read machine state and
//! write spindle/DIO/AIO/rotary-unlock outputs, without owning the hardware.

/// Axis index as used by `joint_acc_limit`/`joint_vel_limit`/`rotary_unlock`.
pub type AxisIndex = u8;

/// Everything `run_cycle` needs from the servo/hardware layer. Implementors
/// own the actual I/O; the planner only ever holds `&mut dyn MotionIo` for
/// the duration of one `run_cycle` call.
pub trait MotionIo {
    /// Live feed-override multiplier (1.0 = no override).
    fn net_feed_scale(&self) -> f64;

    /// Commanded spindle speed, in revolutions per unit time.
    fn spindle_speed(&self) -> f64;
    fn set_spindle_speed(&mut self, speed: f64);

    /// Commanded spindle direction: `1` forward, `-1` reverse.
    fn spindle_direction(&self) -> i8;
    fn set_spindle_direction(&mut self, direction: i8);

    /// Measured signed spindle position, in revolutions.
    fn spindle_revs(&self) -> f64;

    /// Measured spindle velocity, in revolutions per unit time.
    fn spindle_speed_in(&self) -> f64;

    /// Whether the spindle has reached its commanded speed.
    fn spindle_is_atspeed(&self) -> bool;

    /// Request (or observe) one-shot index-pulse arming for position sync.
    fn spindle_index_enable(&self) -> bool;
    fn set_spindle_index_enable(&mut self, armed: bool);

    fn dio_write(&mut self, index: u8, on: bool);
    fn aio_write(&mut self, index: u8, value: f64);

    fn rotary_unlock(&mut self, axis: AxisIndex, on: bool);
    fn rotary_is_unlocked(&self, axis: AxisIndex) -> bool;

    /// Per-axis machine acceleration bound, used for planar-inscribed
    /// computations during blending.
    fn joint_acc_limit(&self, axis: AxisIndex) -> f64;
    /// Per-axis machine velocity bound.
    fn joint_vel_limit(&self, axis: AxisIndex) -> f64;
}
