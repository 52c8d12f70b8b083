//! Pre-built mock filesystem scenarios for testing.
//!
//! These scenarios provide realistic sysfs/procfs states for the hardware
//! revisions the sampler supports.

use super::filesystem::MockFs;

impl MockFs {
    /// Creates a healthy XO-1.5 running a signed-counter kernel,
    /// discharging on battery.
    pub fn xo15_discharging() -> Self {
        let fs = Self::new();

        fs.add_file("/proc/sys/kernel/osrelease", "3.0.19_xo1.5\n");
        fs.add_file("/proc/device-tree/model", "XO-1.5\0");
        fs.add_file("/boot/olpc_build", "os883\n");

        let bat = "/sys/class/power_supply/olpc-battery";
        fs.add_file(format!("{}/type", bat), "Battery\n");
        fs.add_file(format!("{}/capacity", bat), "85\n");
        fs.add_file(format!("{}/voltage_avg", bat), "6342400\n");
        fs.add_file(format!("{}/current_avg", bat), "-523000\n");
        fs.add_file(format!("{}/temp", bat), "321\n");
        fs.add_file(format!("{}/status", bat), "Discharging\n");
        fs.add_file(format!("{}/charge_counter", bat), "123456\n");
        fs.add_file(format!("{}/manufacturer", bat), "BYD\n");
        fs.add_file(format!("{}/technology", bat), "LiFe\n");
        fs.add_file(format!("{}/serial_number", bat), "001661AD\n");

        // AC adapter entry, present so discovery has to skip it
        fs.add_file("/sys/class/power_supply/olpc-ac/type", "Mains\n");
        fs.add_file("/sys/class/power_supply/olpc-ac/online", "0\n");

        fs
    }

    /// Creates an XO-1 on a legacy kernel with the raw wraparound
    /// charge-counter encoding and no percentage capacity attribute.
    pub fn xo1_legacy() -> Self {
        let fs = Self::new();

        fs.add_file("/proc/sys/kernel/osrelease", "2.6.22-20080316.1.olpc\n");
        fs.add_file("/proc/device-tree/model", "XO-1\0");
        fs.add_file("/boot/olpc_build", "os656\n");

        let bat = "/sys/class/power_supply/olpc-battery";
        fs.add_file(format!("{}/type", bat), "Battery\n");
        fs.add_file(format!("{}/capacity_level", bat), "High\n");
        fs.add_file(format!("{}/voltage_avg", bat), "6718000\n");
        fs.add_file(format!("{}/current_avg", bat), "-280000\n");
        fs.add_file(format!("{}/temp", bat), "287\n");
        fs.add_file(format!("{}/status", bat), "Discharging\n");
        fs.add_file(format!("{}/charge_counter", bat), "220\n");
        fs.add_file(format!("{}/manufacturer", bat), "GoldPeak\n");
        fs.add_file(format!("{}/technology", bat), "NiMH\n");

        fs
    }

    /// Creates an XO-1.5 where most battery attributes are unreadable.
    ///
    /// Only `status` survives; every numeric field must come out as a
    /// sentinel rather than aborting the tick.
    pub fn degraded_battery() -> Self {
        let fs = Self::new();

        fs.add_file("/proc/sys/kernel/osrelease", "3.0.19_xo1.5\n");
        fs.add_file("/proc/device-tree/model", "XO-1.5\0");

        let bat = "/sys/class/power_supply/olpc-battery";
        fs.add_file(format!("{}/type", bat), "Battery\n");
        fs.add_file(format!("{}/status", bat), "Not charging\n");

        fs
    }
}
