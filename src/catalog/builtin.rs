//! Built-in suites shipped with the dashboard

use super::{Catalog, Suite, TestCaseDescriptor};

/// Suite used when a requested suite id is unknown
pub const DEFAULT_SUITE: &str = "CAN Bus Communication Tests";

/// Build the built-in catalog
pub fn catalog() -> Catalog {
    let suites = vec![
        Suite::new(
            DEFAULT_SUITE,
            vec![
                TestCaseDescriptor::pass("test_can_init"),
                TestCaseDescriptor::pass("test_can_send"),
                TestCaseDescriptor::fail("test_can_receive", "Timeout waiting for CAN response"),
                TestCaseDescriptor::pass("test_can_error_handling"),
                TestCaseDescriptor::pass("test_can_bus_off"),
            ],
        ),
        Suite::new(
            "GPIO Functionality Tests",
            vec![
                TestCaseDescriptor::pass("test_gpio_read"),
                TestCaseDescriptor::pass("test_gpio_write"),
                TestCaseDescriptor::pass("test_gpio_toggle"),
                TestCaseDescriptor::fail("test_gpio_interrupt", "Interrupt not triggered"),
            ],
        ),
        Suite::new(
            "Sensor Integration Tests",
            vec![
                TestCaseDescriptor::pass("test_sensor_init"),
                TestCaseDescriptor::pass("test_sensor_data_read"),
                TestCaseDescriptor::pass("test_i2c_communication"),
                TestCaseDescriptor::fail(
                    "test_sensor_calibration",
                    "Calibration values out of range",
                ),
            ],
        ),
        Suite::new(
            "Power Management Tests",
            vec![
                TestCaseDescriptor::pass("test_power_on_sequence"),
                TestCaseDescriptor::pass("test_voltage_monitoring"),
                TestCaseDescriptor::pass("test_low_power_mode"),
                TestCaseDescriptor::pass("test_power_failure_recovery"),
            ],
        ),
    ];

    Catalog::from_parts(suites, 0)
}
