//! Memory — то немногое, что нужно планировщику
//! Memory — the little the scheduler needs
//!
//! Физическая память и адресные пространства — внешние коллабораторы.
//! Physical memory and address spaces are external collaborators.
//!
//! Два слоя / Two layers:
//!   pool  — пул управляющих блоков фиксированной ёмкости (generational slots)
//!           fixed-capacity control block pool (generational slots)
//!   stack — регион стека потока, которым владеет вызывающий
//!           a thread stack region owned by the caller

pub mod pool;
pub mod stack;
