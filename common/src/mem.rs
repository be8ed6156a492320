use std::io::{self, Read, Write};

// Little-endian helpers for the console wire protocol. Fields are 1, 2, 3 or 4
// bytes wide; 3-byte fields carry 18-bit bus addresses.

pub trait ReadLe {
    fn read_le(&mut self, nbytes: usize) -> io::Result<u32>;

    fn read_u8(&mut self) -> io::Result<u8> {
        Ok(self.read_le(1)? as u8)
    }

    fn read_i8(&mut self) -> io::Result<i8> {
        Ok(self.read_le(1)? as u8 as i8)
    }

    fn read_u16(&mut self) -> io::Result<u16> {
        Ok(self.read_le(2)? as u16)
    }

    fn read_i16(&mut self) -> io::Result<i16> {
        Ok(self.read_le(2)? as u16 as i16)
    }

    fn read_u24(&mut self) -> io::Result<u32> {
        self.read_le(3)
    }

    fn read_u32(&mut self) -> io::Result<u32> {
        self.read_le(4)
    }

    fn read_i32(&mut self) -> io::Result<i32> {
        Ok(self.read_le(4)? as i32)
    }

    // 2-byte length followed by that many bytes.
    fn read_string(&mut self) -> io::Result<String>;
}

impl<T: Read> ReadLe for T {
    fn read_le(&mut self, nbytes: usize) -> io::Result<u32> {
        assert!(nbytes <= 4);
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf[..nbytes])?;
        Ok(u32::from_le_bytes(buf))
    }

    fn read_string(&mut self) -> io::Result<String> {
        let len = self.read_u16()? as usize;
        let mut bytes = vec![0u8; len];
        self.read_exact(&mut bytes)?;
        String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

////////////////////////////////////////////////////////////////////////////////

pub trait WriteLe {
    fn write_le(&mut self, val: u32, nbytes: usize) -> io::Result<()>;

    fn write_u8(&mut self, val: u8) -> io::Result<()> {
        self.write_le(val as u32, 1)
    }

    fn write_i8(&mut self, val: i8) -> io::Result<()> {
        self.write_le(val as u8 as u32, 1)
    }

    fn write_u16(&mut self, val: u16) -> io::Result<()> {
        self.write_le(val as u32, 2)
    }

    fn write_i16(&mut self, val: i16) -> io::Result<()> {
        self.write_le(val as u16 as u32, 2)
    }

    fn write_u24(&mut self, val: u32) -> io::Result<()> {
        self.write_le(val, 3)
    }

    fn write_u32(&mut self, val: u32) -> io::Result<()> {
        self.write_le(val, 4)
    }

    fn write_i32(&mut self, val: i32) -> io::Result<()> {
        self.write_le(val as u32, 4)
    }

    fn write_string(&mut self, val: &str) -> io::Result<()>;
}

impl<T: Write> WriteLe for T {
    fn write_le(&mut self, val: u32, nbytes: usize) -> io::Result<()> {
        assert!(nbytes <= 4);
        self.write_all(&val.to_le_bytes()[..nbytes])
    }

    fn write_string(&mut self, val: &str) -> io::Result<()> {
        let len = u16::try_from(val.len())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "string too long for wire"))?;
        self.write_u16(len)?;
        self.write_all(val.as_bytes())
    }
}
