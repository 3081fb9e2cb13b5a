/// runnable walkthroughs: network compilation and integration of a few textbook mechanisms
pub mod network_examples;
