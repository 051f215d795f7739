//! Socket family (spec.md §4.10.5, `0x1400..=0x14FF`). Sockets share the
//! same fd integer space as files and pipes (`FDTable`), matching POSIX.

use crate::errors::{VmError, VmResult};
use crate::stack::OperandStack;
use crate::syscall::registry::{FDTable, FdEntry};
use crate::value::Value;
use std::net::{SocketAddr, TcpListener, TcpStream, UdpSocket};

pub const SOCKET: u16 = 0x1400;
pub const BIND: u16 = 0x1401;
pub const LISTEN: u16 = 0x1402;
pub const ACCEPT: u16 = 0x1403;
pub const CONNECT: u16 = 0x1404;
pub const SEND: u16 = 0x1405;
pub const RECV: u16 = 0x1406;
pub const SENDTO: u16 = 0x1407;
pub const RECVFROM: u16 = 0x1408;
pub const SHUTDOWN: u16 = 0x1409;

pub const SOCK_STREAM: i64 = 1;
pub const SOCK_DGRAM: i64 = 2;

fn addr(host: &str, port: i64) -> VmResult<SocketAddr> {
    format!("{host}:{port}")
        .parse()
        .map_err(|_| VmError::Type { expected: "host:port".to_string(), found: format!("{host}:{port}") })
}

pub fn socket(stack: &mut OperandStack, fds: &FDTable) -> VmResult<()> {
    let ty = stack.pop()?.as_i64()?;
    let _family = stack.pop()?.as_i64()?;
    let fd = match ty {
        SOCK_DGRAM => fds.insert(FdEntry::Udp(UdpSocket::bind("0.0.0.0:0")?)),
        _ => {
            // A stream socket has no OS handle until BIND/CONNECT; park it
            // as a not-yet-connected listener bound to an ephemeral port so
            // the fd is already valid for subsequent calls to replace.
            fds.insert(FdEntry::TcpListener(TcpListener::bind("0.0.0.0:0")?))
        }
    };
    stack.push(Value::Int(fd));
    Ok(())
}

pub fn bind(stack: &mut OperandStack, fds: &FDTable) -> VmResult<()> {
    let port = stack.pop()?.as_i64()?;
    let host = stack.pop()?.as_string()?;
    let fd = stack.pop()?.as_i64()? as i32;
    let target = addr(&host, port)?;
    let entry = fds.remove(fd)?;
    let replaced = match entry {
        FdEntry::Udp(_) => FdEntry::Udp(UdpSocket::bind(target)?),
        _ => FdEntry::TcpListener(TcpListener::bind(target)?),
    };
    fds.insert(replaced);
    stack.push(Value::Int(0));
    Ok(())
}

pub fn listen(stack: &mut OperandStack, _fds: &FDTable) -> VmResult<()> {
    let _backlog = stack.pop()?.as_i64()?;
    let _fd = stack.pop()?.as_i64()?;
    // std::net::TcpListener is already listening once bound.
    stack.push(Value::Int(0));
    Ok(())
}

pub fn accept(stack: &mut OperandStack, fds: &FDTable) -> VmResult<()> {
    let fd = stack.pop()?.as_i64()? as i32;
    let (stream, peer) = fds.with(fd, |entry| match entry {
        FdEntry::TcpListener(listener) => Ok(listener.accept()?),
        _ => Err(VmError::Type { expected: "a listening socket".to_string(), found: "other fd".to_string() }),
    })?;
    let cfd = fds.insert(FdEntry::TcpStream(stream));
    stack.push(Value::array(vec![
        Value::Int(cfd),
        Value::string(peer.ip().to_string()),
        Value::Int(peer.port() as i32),
    ]));
    Ok(())
}

pub fn connect(stack: &mut OperandStack, fds: &FDTable) -> VmResult<()> {
    let port = stack.pop()?.as_i64()?;
    let host = stack.pop()?.as_string()?;
    let fd = stack.pop()?.as_i64()? as i32;
    let target = addr(&host, port)?;
    let stream = TcpStream::connect(target)?;
    fds.remove(fd)?;
    fds.insert(FdEntry::TcpStream(stream));
    stack.push(Value::Int(0));
    Ok(())
}

pub fn send(stack: &mut OperandStack, fds: &FDTable) -> VmResult<()> {
    let data = stack.pop()?.as_string()?;
    let fd = stack.pop()?.as_i64()? as i32;
    let n = fds.with(fd, |entry| entry.write(data.as_bytes()))?;
    stack.push(Value::Int(n as i32));
    Ok(())
}

pub fn recv(stack: &mut OperandStack, fds: &FDTable) -> VmResult<()> {
    let n = stack.pop()?.as_i64()? as usize;
    let fd = stack.pop()?.as_i64()? as i32;
    let mut buf = vec![0u8; n];
    let got = fds.with(fd, |entry| entry.read(&mut buf))?;
    buf.truncate(got);
    stack.push(Value::array(buf.into_iter().map(|b| Value::Byte(b as i8)).collect()));
    Ok(())
}

pub fn sendto(stack: &mut OperandStack, fds: &FDTable) -> VmResult<()> {
    let port = stack.pop()?.as_i64()?;
    let host = stack.pop()?.as_string()?;
    let data = stack.pop()?.as_string()?;
    let fd = stack.pop()?.as_i64()? as i32;
    let target = addr(&host, port)?;
    let n = fds.with(fd, |entry| match entry {
        FdEntry::Udp(sock) => Ok(sock.send_to(data.as_bytes(), target)?),
        _ => Err(VmError::Type { expected: "a datagram socket".to_string(), found: "other fd".to_string() }),
    })?;
    stack.push(Value::Int(n as i32));
    Ok(())
}

pub fn recvfrom(stack: &mut OperandStack, fds: &FDTable) -> VmResult<()> {
    let n = stack.pop()?.as_i64()? as usize;
    let fd = stack.pop()?.as_i64()? as i32;
    let mut buf = vec![0u8; n];
    let (got, from) = fds.with(fd, |entry| match entry {
        FdEntry::Udp(sock) => Ok(sock.recv_from(&mut buf)?),
        _ => Err(VmError::Type { expected: "a datagram socket".to_string(), found: "other fd".to_string() }),
    })?;
    buf.truncate(got);
    stack.push(Value::array(vec![
        Value::array(buf.into_iter().map(|b| Value::Byte(b as i8)).collect()),
        Value::string(from.ip().to_string()),
        Value::Int(from.port() as i32),
    ]));
    Ok(())
}

pub fn shutdown(stack: &mut OperandStack, fds: &FDTable) -> VmResult<()> {
    let how = stack.pop()?.as_i64()?;
    let fd = stack.pop()?.as_i64()? as i32;
    let direction = match how {
        0 => std::net::Shutdown::Read,
        1 => std::net::Shutdown::Write,
        _ => std::net::Shutdown::Both,
    };
    fds.with(fd, |entry| match entry {
        FdEntry::TcpStream(stream) => Ok(stream.shutdown(direction)?),
        _ => Ok(()),
    })?;
    stack.push(Value::Int(0));
    Ok(())
}
