// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// Image store with hex/bin output helpers.

use std::io::{self, Write};

/// Default number of data bytes per Intel HEX record.
pub const HEX_RECORD_SIZE: usize = 16;

/// The assembled image: a linear byte buffer in emission order plus the
/// load address of its first byte. `load_addr + bytes.len()` is the next
/// address to emit.
#[derive(Debug)]
pub struct ImageStore {
    bytes: Vec<u8>,
    load_addr: u16,
    record_size: usize,
}

impl Default for ImageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            bytes: Vec::new(),
            load_addr: 0,
            record_size: HEX_RECORD_SIZE,
        }
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
        self.load_addr = 0;
    }

    pub fn set_load_addr(&mut self, addr: u16) {
        self.load_addr = addr;
    }

    #[must_use]
    pub fn load_addr(&self) -> u16 {
        self.load_addr
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn take_bytes(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.bytes)
    }

    pub fn store(&mut self, val: u8) {
        self.bytes.push(val);
    }

    pub fn store_slice(&mut self, values: &[u8]) {
        self.bytes.extend_from_slice(values);
    }

    /// Overwrite a single byte; the patcher calls this after Pass 2.
    pub fn patch(&mut self, offset: usize, val: u8) {
        if let Some(slot) = self.bytes.get_mut(offset) {
            *slot = val;
        }
    }

    /// Write Intel HEX records for the buffer.
    ///
    /// Records carry at most `record_size` data bytes, addressed from
    /// `load_addr + offset`. All hex is uppercase, lines end CRLF, and the
    /// stream is terminated by the fixed EOF record.
    pub fn write_hex<W: Write>(&self, mut out: W) -> io::Result<()> {
        for (index, chunk) in self.bytes.chunks(self.record_size).enumerate() {
            let addr = self
                .load_addr
                .wrapping_add((index * self.record_size) as u16);
            let mut checksum: u8 = chunk.len() as u8;
            checksum = checksum.wrapping_add((addr >> 8) as u8);
            checksum = checksum.wrapping_add((addr & 0xff) as u8);
            let mut data = String::with_capacity(chunk.len() * 2);
            for val in chunk {
                data.push_str(&format!("{val:02X}"));
                checksum = checksum.wrapping_add(*val);
            }
            checksum = (!checksum).wrapping_add(1);
            write!(out, ":{:02X}{:04X}00{}{:02X}\r\n", chunk.len(), addr, data, checksum)?;
        }
        write!(out, ":00000001FF\r\n")?;
        Ok(())
    }

    /// The full Intel HEX stream as a string.
    #[must_use]
    pub fn hex_string(&self) -> String {
        let mut out = Vec::new();
        // Writing to a Vec cannot fail.
        self.write_hex(&mut out).expect("hex to memory");
        String::from_utf8(out).expect("hex is ascii")
    }

    /// Write the raw image bytes (a CP/M `.com` payload when the load
    /// address is 0100h).
    pub fn write_bin<W: Write>(&self, mut out: W) -> io::Result<()> {
        out.write_all(&self.bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::ImageStore;

    fn parse_hex_byte(s: &str) -> u8 {
        u8::from_str_radix(s, 16).unwrap()
    }

    fn verify_checksum(line: &str) {
        assert!(line.starts_with(':'), "record must start with ':'");
        let bytes = &line[1..];
        let len = parse_hex_byte(&bytes[0..2]) as usize;
        let data_start = 8;
        let data_end = data_start + len * 2;
        let mut sum: u8 = 0;
        for idx in (0..data_end + 2).step_by(2) {
            sum = sum.wrapping_add(parse_hex_byte(&bytes[idx..idx + 2]));
        }
        assert_eq!(sum, 0, "record bytes must sum to 0 mod 256: {line}");
    }

    #[test]
    fn writes_hex_records_with_valid_checksums() {
        let mut image = ImageStore::new();
        image.set_load_addr(0x0100);
        image.store_slice(&[0x0E, 0x09, 0x11, 0x0B, 0x01, 0xCD, 0x05, 0x00, 0xC9]);
        let text = image.hex_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in &lines {
            verify_checksum(line);
        }
        assert_eq!(lines[0], ":090100000E09110B01CD0500C927");
    }

    #[test]
    fn splits_records_at_sixteen_bytes() {
        let mut image = ImageStore::new();
        image.set_load_addr(0x0200);
        image.store_slice(&[0xAA; 20]);
        let text = image.hex_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with(":10020000"));
        assert!(lines[1].starts_with(":04021000"));
        for line in &lines {
            verify_checksum(line);
        }
    }

    #[test]
    fn terminates_with_eof_record_and_crlf() {
        let mut image = ImageStore::new();
        image.store(0x42);
        let text = image.hex_string();
        assert!(text.ends_with(":00000001FF\r\n"));
        for line in text.lines() {
            assert!(!line.ends_with('\r'));
        }
        assert_eq!(text.matches("\r\n").count(), 2);
    }

    #[test]
    fn empty_image_is_just_the_terminator() {
        let image = ImageStore::new();
        assert_eq!(image.hex_string(), ":00000001FF\r\n");
    }

    #[test]
    fn patch_overwrites_by_offset() {
        let mut image = ImageStore::new();
        image.store_slice(&[0xC3, 0x00, 0x00]);
        image.patch(1, 0x04);
        image.patch(2, 0x01);
        assert_eq!(image.bytes(), &[0xC3, 0x04, 0x01]);
    }

    #[test]
    fn bin_output_is_raw_buffer() {
        let mut image = ImageStore::new();
        image.store_slice(&[1, 2, 3]);
        let mut out = Vec::new();
        image.write_bin(&mut out).unwrap();
        assert_eq!(out, vec![1, 2, 3]);
    }
}
