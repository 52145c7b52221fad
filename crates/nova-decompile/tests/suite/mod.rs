mod branches;
mod exceptions;
mod fixtures;
mod folding;
mod logging;
mod loops;
mod pipeline;
mod switch;
