//! End-to-end suite for the message transport.


#[cfg(test)]
mod flow_scenarios;

#[cfg(test)]
mod threaded;
