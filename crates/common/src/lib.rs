// chirpy-common: wire types shared between the Chirpy server and its clients

pub mod types;
