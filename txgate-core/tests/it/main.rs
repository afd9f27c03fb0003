mod completion;
mod transmit;
