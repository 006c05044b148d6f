//! [`Bus`] over an FTDI FT232H USB-to-I2C bridge (libMPSSE)

use std::ptr;
use std::time::Duration;

use log::debug;

use crate::error::{Mpu6050Error, Result};
use crate::ffi::*;
use crate::transport::{Bus, BusFault, BusState, TransferStatus};

fn ftdi_error(status: FT_STATUS) -> Mpu6050Error {
    Mpu6050Error::FtdiError {
        status,
        description: status_to_string(status).to_string(),
    }
}

/// An open FT232H I2C channel
pub struct FtdiBus {
    handle: FT_HANDLE,
    fault: BusFault,
}

impl FtdiBus {
    /// Open and configure an I2C channel
    ///
    /// # Arguments
    /// * `channel_index` - Index of the I2C channel to use (usually 0)
    ///
    /// # Returns
    /// * `Ok(FtdiBus)` - Channel running at 1 MHz with 1 ms latency
    /// * `Err(Mpu6050Error)` - No bridge attached or the driver refused
    pub fn open(channel_index: u32) -> Result<Self> {
        let mut num_channels: DWORD = 0;
        let status = unsafe { I2C_GetNumChannels(&mut num_channels) };
        if status != FT_OK {
            return Err(ftdi_error(status));
        }

        if num_channels == 0 {
            return Err(Mpu6050Error::NoChannelsFound);
        }

        if channel_index >= num_channels {
            return Err(Mpu6050Error::InvalidChannel(channel_index));
        }

        let mut handle: FT_HANDLE = ptr::null_mut();
        let status = unsafe { I2C_OpenChannel(channel_index, &mut handle) };
        if status != FT_OK {
            return Err(ftdi_error(status));
        }

        let mut config = ChannelConfig {
            ClockRate: I2C_CLOCK_FAST_MODE_PLUS,
            LatencyTimer: 1,
            Options: 0,
            Pin: 0,
            currentPinState: 0,
        };

        let status = unsafe { I2C_InitChannel(handle, &mut config) };
        if status != FT_OK {
            unsafe { I2C_CloseChannel(handle) };
            return Err(ftdi_error(status));
        }

        debug!("opened FT232H I2C channel {}", channel_index);
        Ok(Self {
            handle,
            fault: BusFault::Other,
        })
    }

    /// Map a libMPSSE result onto the bus status model. A short transfer
    /// with `FT_OK` means the target stopped acknowledging.
    fn settle(&mut self, status: FT_STATUS, expected: usize, transferred: DWORD) -> TransferStatus {
        if status != FT_OK {
            debug!("libMPSSE transfer failed: {}", status_to_string(status));
            self.fault = BusFault::Other;
            TransferStatus::Fault
        } else if (transferred as usize) < expected {
            self.fault = BusFault::NoAck;
            TransferStatus::Fault
        } else {
            TransferStatus::Ok
        }
    }
}

impl Bus for FtdiBus {
    // libMPSSE applies its own USB timeouts
    fn transmit(&mut self, address: u8, bytes: &[u8], _timeout: Duration) -> TransferStatus {
        let mut transferred: DWORD = 0;
        let options = I2C_TRANSFER_OPTIONS_START_BIT
            | I2C_TRANSFER_OPTIONS_STOP_BIT
            | I2C_TRANSFER_OPTIONS_BREAK_ON_NACK;

        let status = unsafe {
            I2C_DeviceWrite(
                self.handle,
                address,
                bytes.len() as DWORD,
                bytes.as_ptr(),
                &mut transferred,
                options,
            )
        };

        self.settle(status, bytes.len(), transferred)
    }

    fn receive(&mut self, address: u8, buffer: &mut [u8], _timeout: Duration) -> TransferStatus {
        let mut transferred: DWORD = 0;
        let options = I2C_TRANSFER_OPTIONS_START_BIT
            | I2C_TRANSFER_OPTIONS_STOP_BIT
            | I2C_TRANSFER_OPTIONS_NACK_LAST_BYTE;

        let status = unsafe {
            I2C_DeviceRead(
                self.handle,
                address,
                buffer.len() as DWORD,
                buffer.as_mut_ptr(),
                &mut transferred,
                options,
            )
        };

        self.settle(status, buffer.len(), transferred)
    }

    fn current_fault(&self) -> BusFault {
        self.fault
    }

    // Every libMPSSE call blocks until the transfer is done
    fn bus_state(&self) -> BusState {
        BusState::Ready
    }
}

impl Drop for FtdiBus {
    fn drop(&mut self) {
        unsafe {
            I2C_CloseChannel(self.handle);
        }
    }
}
