// UI module - presentation logic and the Slint front end
//
// This module contains:
// - EventLoopBridge: Carries worker results back to the presentation context
// - Presenter: Toolkit-independent presentation logic driven by a tick
// - GuiController: Wires the Slint window to the presenter

pub mod bridge;
pub mod controller;
pub mod presenter;

pub use bridge::{EventLoopBridge, EventLoopBridgeHandle};
pub use controller::GuiController;
pub use presenter::{AppEvent, Presenter};
