mod dispatch_expansion;
mod transfer_conservation;
