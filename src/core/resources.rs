use super::process::Process;

pub type Memory = u64;
pub type Devices = u64;

/// Total and available memory/device units of the simulated machine.
///
/// Admission goes through [`ResourceLedger::is_available`] before
/// [`ResourceLedger::allocate`]; every allocation is paired with exactly one
/// [`ResourceLedger::release`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResourceLedger {
    total_memory: Memory,
    total_devices: Devices,
    avail_memory: Memory,
    avail_devices: Devices,
}

impl ResourceLedger {
    pub fn new(total_memory: Memory, total_devices: Devices) -> Self {
        let mut ledger = Self::default();
        ledger.configure(total_memory, total_devices);
        ledger
    }

    pub fn configure(&mut self, total_memory: Memory, total_devices: Devices) {
        self.total_memory = total_memory;
        self.total_devices = total_devices;
        self.avail_memory = total_memory;
        self.avail_devices = total_devices;
    }

    // Permanent rejection: compared against totals, not what is free right now
    pub fn exceeds_capacity(&self, proc: &Process) -> bool {
        proc.memory > self.total_memory || proc.devices > self.total_devices
    }

    pub fn is_available(&self, proc: &Process) -> bool {
        proc.memory <= self.avail_memory && proc.devices <= self.avail_devices
    }

    pub fn allocate(&mut self, proc: &Process) {
        debug_assert!(
            self.is_available(proc),
            "Allocating beyond availability for job {}",
            proc.job_id
        );
        self.avail_memory -= proc.memory;
        self.avail_devices -= proc.devices;
    }

    pub fn release(&mut self, proc: &Process) {
        self.avail_memory += proc.memory;
        self.avail_devices += proc.devices;
        debug_assert!(
            self.avail_memory <= self.total_memory && self.avail_devices <= self.total_devices,
            "Releasing job {} pushed availability above totals",
            proc.job_id
        );
    }

    pub fn total_memory(&self) -> Memory {
        self.total_memory
    }

    pub fn total_devices(&self) -> Devices {
        self.total_devices
    }

    pub fn avail_memory(&self) -> Memory {
        self.avail_memory
    }

    pub fn avail_devices(&self) -> Devices {
        self.avail_devices
    }
}
